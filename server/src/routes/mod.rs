use rocket::request::FromParam;

use escrow_chat_core::{ChatId, InvalidChatId};

pub mod chat;
pub mod pages;

/// [`ChatId`] as a path segment
///
/// Rejecting anything that is not ten digits also keeps raw user input out of
/// storage paths.
pub struct ChatIdParam(pub ChatId);

impl<'a> FromParam<'a> for ChatIdParam {
    type Error = InvalidChatId;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse().map(ChatIdParam)
    }
}

/// Error with its whole source chain, as served to API clients
pub(crate) fn verbose_error(err: &dyn std::error::Error) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        description += &format!(": {err}");
        source = err.source();
    }
    description
}
