pub mod inbox;
pub mod outbox;
pub mod rate_limit;
