mod error;
mod record;
mod upgrade;

pub use error::PersistError;
pub use record::{PersistedRecord, SceneFile};
pub use upgrade::{upgrade, UpgradeRule, CURRENT_VERSION, UPGRADE_RULES};
