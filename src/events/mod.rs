pub mod bus;
pub mod envelope;

pub use bus::{EventBus, EventPublisher};
pub use envelope::TicketEvent;
