pub mod cache;

pub use cache::{ColourWheel, WheelCache, WheelMode, pointer_angle};
