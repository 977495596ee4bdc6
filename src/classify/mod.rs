pub mod catalog;
pub mod classifier;
pub mod name_validator;

pub use catalog::{
    catalog_from_config, CatalogStatus, CommandCatalog, DatasetCatalog, StaticCatalog,
};
pub use classifier::{Classification, PathClassifier};
pub use name_validator::{NameValidator, Rejection, Verdict};
