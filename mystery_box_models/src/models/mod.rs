pub mod cloud_config;
pub mod multipass;
pub mod vm_record;

pub use self::cloud_config::{CloudConfig, CloudUser, WriteFile};
pub use self::multipass::{InfoReport, InstanceInfo, ListEntry, ListReport};
pub use self::vm_record::{VmRecord, VmState};
