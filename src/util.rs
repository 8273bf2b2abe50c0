pub(crate) mod bit_util;
