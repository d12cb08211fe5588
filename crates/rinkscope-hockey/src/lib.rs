// Hockey data layer: season loading, cohort combination, role split and
// reference-subgroup extraction.

pub mod combine;
pub mod goons;
pub mod record;
pub mod roles;
pub mod season;

pub use combine::{combine_loaded, combine_seasons};
pub use goons::{find_goons, ReferenceSubgroup};
pub use record::{CombinedPlayerRecord, PlayerIdentity, PlayerSeasonRecord, Stat, StatLine};
pub use roles::{group_title, prepare_group, split_roles, PreparedGroup, Role, RoleSplit};
pub use season::{load_season, load_season_from_reader, write_combined};
