pub use crate::sources::future::FromFuture;
pub use crate::sources::stream::{FromBroadcast, FromStream};
pub use crate::sources::timer::{After, Every};
