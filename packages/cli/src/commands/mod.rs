pub mod edit;
pub mod inspect;
pub mod roundtrip;

pub use edit::{edit, EditArgs};
pub use inspect::{inspect, InspectArgs};
pub use roundtrip::{roundtrip, RoundtripArgs};
