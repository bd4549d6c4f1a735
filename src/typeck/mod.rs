pub mod check;
pub mod env;
pub mod infer;
pub mod resolver;
pub mod scope;
pub mod types;

pub use check::check_method;
pub use env::TypeEnv;
pub use resolver::TypeResolver;
pub use types::{PrimitiveType, Type};
