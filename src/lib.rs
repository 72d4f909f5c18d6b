pub mod backup;
pub mod fs_utils;
pub mod logging;
pub mod paths;
pub mod prompt;
pub mod replace;
pub mod session;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
