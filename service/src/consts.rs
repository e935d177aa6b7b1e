pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "8080";

/// List window served when the query omits one
pub const DEFAULT_WINDOW: usize = 20;
