mod error;
mod fields;
mod value;

pub use error::FieldError;
pub use fields::{field, field_id_by_name, field_spec, ActorFields, FieldHook, FieldSpec, FIELD_TABLE};
pub use value::{FieldMut, FieldRef, Value, ValueKind};
