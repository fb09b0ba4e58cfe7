pub(crate) mod threading;
