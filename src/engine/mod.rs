//! Planes, screen items and everything that turns them into frames.

pub mod draw_list;
pub mod error;
pub mod frameout;
pub mod graphics;
pub mod plane;
pub mod plane_list;
pub mod screen_item;
pub mod throttle;
pub mod transitions;

pub use error::GfxError;
pub use frameout::{FrameOut, Services};
pub use graphics::Graphics;
pub use plane::{Plane, PlaneType};
pub use plane_list::PlaneList;
pub use screen_item::ScreenItem;
pub use transitions::{ScrollRequest, ShowStyleRequest, ShowStyleType};
