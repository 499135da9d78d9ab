mod group;
mod part;
mod session;

pub use group::GroupRepository;
pub use part::PartRepository;
pub use session::SessionRepository;
