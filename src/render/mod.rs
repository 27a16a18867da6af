pub(crate) mod compositor;
pub(crate) mod fit;
pub(crate) mod frame;
pub(crate) mod shape;
pub(crate) mod text;
