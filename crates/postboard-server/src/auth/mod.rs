pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{Claims, JwtManager};
pub use password::PasswordService;
pub use session::{AuthUser, SessionUser, Viewer};
