pub mod access_request;
pub mod alert;
pub mod assignment;
pub mod enums;
pub mod scope;

pub use access_request::PatientAccessRequest;
pub use alert::ClinicalAlertRecord;
pub use assignment::PatientAssignment;
pub use scope::{PlatformAdmin, QueryScope};
