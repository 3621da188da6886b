mod codec;
mod header;

pub use codec::{CookieCodec, SealedCookieCodec, SignedCookieCodec};
pub use header::CookieOptions;

pub(crate) use codec::codec_for;
pub(crate) use header::{get_cookie_value, header_clear_cookie, header_set_cookie};
