/// BIND9 zone management
pub mod types;
pub mod zone;
pub mod zones;

pub use types::{AddRecordArgs, CreateZoneArgs, DeleteRecordArgs, RecordChange, ZoneSummary};
pub use zone::{DnsZone, ZoneRecord};
pub use zones::DnsTools;
