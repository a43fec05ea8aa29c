pub mod blob;
pub mod domain;
pub mod endpoint;
pub mod key;
pub mod mapping;
pub mod types;

pub use blob::{BlobInfo, BlobVersion};
pub use domain::{DomainError, DomainMapping, DomainSettings, DomainStatus, validate_domain};
pub use endpoint::pds_endpoint_for;
pub use key::{
    KeyError, MAX_MAPPING_KEY_LEN, MAX_RECORD_KEY_LEN, sanitize_record_key, validate_mapping_key,
};
pub use mapping::MappingRecord;
pub use types::{OwnerCredential, OwnerHandle, OwnerId};
