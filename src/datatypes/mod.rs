//! Host-side datatypes the built-in codecs produce.

mod object_id;
mod vector;

pub use object_id::ObjectId;
pub use vector::DataApiVector;

pub(crate) use vector::{decode_base64, encode_base64};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Creation time embedded in time-based UUIDs (v1, v6, v7).
pub fn uuid_timestamp(uuid: &Uuid) -> Option<DateTime<Utc>> {
    let (secs, nanos) = uuid.get_timestamp()?.to_unix();
    Utc.timestamp_opt(secs as i64, nanos).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_v7_timestamp() {
        let uuid = Uuid::now_v7();
        let at = uuid_timestamp(&uuid).unwrap();
        assert!((Utc::now() - at).num_seconds().abs() < 5);
    }

    #[test]
    fn test_uuid_v4_has_no_timestamp() {
        assert!(uuid_timestamp(&Uuid::new_v4()).is_none());
    }
}
