pub mod dose;
pub mod enums;
pub mod medication;
pub mod timing;

pub use dose::*;
pub use enums::*;
pub use medication::*;
pub use timing::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid dose: {0}")]
    InvalidDose(String),

    #[error("Invalid strength ratio: {0}")]
    InvalidStrength(String),

    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    #[error("Medication '{0}' has no package information")]
    MissingPackage(String),

    #[error(
        "Package quantity {package_quantity} {package_unit} disagrees with total volume \
         {volume_value} {volume_unit}"
    )]
    PackageVolumeMismatch {
        package_quantity: f64,
        package_unit: String,
        volume_value: f64,
        volume_unit: String,
    },
}
