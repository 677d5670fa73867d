pub const CYCLE_STARTS: &str = "blocks_relay_cycle_starts";
pub const CYCLE_ENDS: &str = "blocks_relay_cycle_ends";
pub const CYCLE_TIME: &str = "blocks_relay_cycle_seconds";

pub const FETCH_FAILURES: &str = "blocks_relay_fetch_failures";
pub const RECORDS_FETCHED: &str = "blocks_relay_records_fetched";

pub const DELIVERIES: &str = "blocks_relay_notifications_delivered";
pub const DELIVERY_FAILURES: &str = "blocks_relay_notifications_failed";

pub const CHECKPOINT: &str = "blocks_relay_checkpoint";
pub const CHECKPOINT_SAVE_FAILURES: &str = "blocks_relay_checkpoint_save_failures";
