pub(crate) mod decode;
pub(crate) mod file;
pub(crate) mod media;
pub(crate) mod resolver;
pub(crate) mod text;
