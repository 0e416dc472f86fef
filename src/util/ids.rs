use bson::oid::ObjectId;
use uuid::Uuid;

use crate::util::error::ServiceError;

const CODE_LEN: usize = 8;

fn short_code(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", prefix, &simple[..CODE_LEN])
}

/// Label code printed on drug batches, e.g. `DRG-1F0C9A2B`.
pub fn drug_code() -> String {
    short_code("DRG")
}

/// Reference code of a stock movement, e.g. `MOV-7D3E11C0`.
pub fn movement_code() -> String {
    short_code("MOV")
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ServiceError::InvalidInput(format!("Invalid {} id: {}", what, raw)))
}
