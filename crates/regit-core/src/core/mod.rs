pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod fs;
pub(crate) mod head;
pub(crate) mod object_id;
pub(crate) mod oracle;
pub(crate) mod outcome;
pub(crate) mod process;
pub(crate) mod reconstruct;
pub(crate) mod remote;
pub(crate) mod resolve;
pub(crate) mod store;
pub(crate) mod workdir;

#[cfg(test)]
pub(crate) mod testing;
