//! Registration form: field values, the shared store, and the direct-entry view.

pub mod store;
pub mod values;
pub mod view;

pub use store::FormStore;
pub use values::{Field, FieldValue, FormValues, SelectedFile, check_documents};
pub use view::{RegistrationForm, SubmitStatus, load_files};
