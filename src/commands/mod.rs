mod password;
mod type_text;
mod wait;
mod wait_time;

pub use password::Password;
pub use type_text::TypeText;
pub use wait::Wait;
pub use wait_time::WaitTime;
