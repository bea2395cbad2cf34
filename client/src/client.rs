use std::borrow::Cow;

use reqwest::{Client as HttpClient, StatusCode, Url};

use educe::Educe;
use serde::de::DeserializeOwned;
use thiserror::Error;

use escrow_chat_core::api::{
    AcceptOfferRequest, AddMessageRequest, MakeOfferRequest, MakeOfferResponse,
    RaiseDisputeRequest,
};
use escrow_chat_core::{ArmoredMessage, ArmoredPrivateKey, ArmoredPublicKey, Chat, ChatId, Party};

/// OpenPGP key pair in ASCII armor
///
/// The client never looks inside the armor: generating the pair, encrypting
/// to the partner's key and decrypting received messages are the caller's
/// job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public: ArmoredPublicKey,
    pub private: ArmoredPrivateKey,
}

#[derive(Debug, Clone)]
pub struct ApiClient<S> {
    /// HTTP client (backed by [reqwest])
    http_client: HttpClient,
    /// API endpoint
    base_url: Url,
    /// Current stage ([detached] / [in chat])
    ///
    /// [detached]: Detached
    /// [in chat]: InChat
    stage: S,
}

/// Client that did not join any chat yet
#[derive(Debug, Clone)]
pub struct Detached;
/// Client bound to one chat and one key pair
///
/// The private key stays local until [`ApiClient::raise_dispute`]
/// deliberately sends it to the server.
#[derive(Educe)]
#[educe(Debug, Clone)]
pub struct InChat {
    chat_id: ChatId,
    role: Party,
    #[educe(Debug(ignore))]
    keys: KeyPair,
}

impl ApiClient<Detached> {
    pub fn new(http_client: HttpClient, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
            stage: Detached,
        }
    }

    /// Creates a chat by offering the public half of `keys`, becoming its
    /// party A
    ///
    /// The new chat's id is meant to be shared with the trade partner out of
    /// band.
    pub async fn make_offer(&self, keys: KeyPair) -> Result<ApiClient<InChat>> {
        let request = MakeOfferRequest {
            pubkey: keys.public.clone(),
        };
        let response = self
            .http_client
            .post(self.url(Method::MakeOffer)?)
            .json(&request)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        let response: MakeOfferResponse = parse_response(response).await?;

        Ok(self.in_chat(response.token, Party::A, keys))
    }

    /// Joins an offered chat, becoming its party B
    ///
    /// Fails if somebody accepted the offer already (see
    /// [`Error::is_conflict`]).
    pub async fn accept_offer(&self, chat_id: ChatId, keys: KeyPair) -> Result<ApiClient<InChat>> {
        let request = AcceptOfferRequest {
            pubkey: keys.public.clone(),
        };
        let response = self
            .http_client
            .post(self.url(Method::AcceptOffer { chat_id })?)
            .json(&request)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        parse_response::<()>(response).await?;

        Ok(self.in_chat(chat_id, Party::B, keys))
    }

    /// Retrieves a chat without being a party of it
    ///
    /// This is the moderator's entry point: once a dispute is raised, the
    /// returned chat carries the revealed private key.
    pub async fn fetch_chat(&self, chat_id: ChatId) -> Result<Chat> {
        let response = self
            .http_client
            .get(self.url(Method::FetchChat { chat_id })?)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        parse_response(response).await
    }

    fn in_chat(&self, chat_id: ChatId, role: Party, keys: KeyPair) -> ApiClient<InChat> {
        ApiClient {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            stage: InChat { chat_id, role, keys },
        }
    }
}

impl ApiClient<InChat> {
    pub fn chat_id(&self) -> ChatId {
        self.stage.chat_id
    }

    pub fn role(&self) -> Party {
        self.stage.role
    }

    pub fn public_key(&self) -> &ArmoredPublicKey {
        &self.stage.keys.public
    }

    /// Appends an encrypted message to the chat
    ///
    /// Fails if the chat is frozen by a dispute.
    pub async fn send_message(&self, message: ArmoredMessage) -> Result<()> {
        let request = AddMessageRequest { message };
        let response = self
            .http_client
            .post(self.url(Method::AddMessage {
                chat_id: self.stage.chat_id,
            })?)
            .json(&request)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        parse_response(response).await
    }

    /// Raises a dispute, revealing this client's private key to the moderator
    ///
    /// The chat stops accepting messages. Disputing an already disputed chat
    /// succeeds and replaces the revealed key.
    pub async fn raise_dispute(&self) -> Result<()> {
        let request = RaiseDisputeRequest {
            private_key: self.stage.keys.private.clone(),
            by_user: self.stage.role,
        };
        let response = self
            .http_client
            .post(self.url(Method::RaiseDispute {
                chat_id: self.stage.chat_id,
            })?)
            .json(&request)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        parse_response(response).await
    }

    /// The whole chat as the server currently stores it
    pub async fn fetch(&self) -> Result<Chat> {
        let response = self
            .http_client
            .get(self.url(Method::FetchChat {
                chat_id: self.stage.chat_id,
            })?)
            .send()
            .await
            .map_err(Reason::SendRequest)?;
        parse_response(response).await
    }
}

impl<S> ApiClient<S> {
    fn url(&self, method: Method) -> Result<Url> {
        let method = match method {
            Method::MakeOffer => Cow::Borrowed("/api/chat/make-offer"),
            Method::AcceptOffer { chat_id } => {
                Cow::Owned(format!("/api/chat/accept-offer/{chat_id}"))
            }
            Method::AddMessage { chat_id } => {
                Cow::Owned(format!("/api/chat/add-message/{chat_id}"))
            }
            Method::RaiseDispute { chat_id } => {
                Cow::Owned(format!("/api/chat/raise-dispute/{chat_id}"))
            }
            Method::FetchChat { chat_id } => Cow::Owned(format!("/api/chat/{chat_id}")),
        };
        let url = self
            .base_url
            .join(&method)
            .map_err(|err| Reason::BuildApiUrl { method, err })?;
        Ok(url)
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let result: Result<T, String> = response.json().await.map_err(Reason::ReceiveAndParse)?;
    if result.is_ok() != status.is_success() {
        return Err(Reason::Confused {
            status,
            response_err: result.err(),
        }
        .into());
    }
    let value = result.map_err(|description| Reason::ServerReturnedError {
        status,
        description,
    })?;
    Ok(value)
}

enum Method {
    MakeOffer,
    AcceptOffer { chat_id: ChatId },
    AddMessage { chat_id: ChatId },
    RaiseDispute { chat_id: ChatId },
    FetchChat { chat_id: ChatId },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(#[from] Reason);

impl Error {
    /// Status code of a server-side rejection, if that is what happened
    pub fn status(&self) -> Option<StatusCode> {
        match &self.0 {
            Reason::ServerReturnedError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server does not know a chat with that id
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The chat's state forbids the operation: the offer is already taken, or
    /// the chat is frozen by a dispute
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}

#[derive(Debug, Error)]
enum Reason {
    #[error("build an url for api method {method}")]
    BuildApiUrl {
        method: Cow<'static, str>,
        #[source]
        err: url::ParseError,
    },
    #[error("send request")]
    SendRequest(#[source] reqwest::Error),
    #[error("receive and parse response")]
    ReceiveAndParse(#[source] reqwest::Error),
    #[error("confused by server response: status={status:?} but response_err={response_err:?}")]
    Confused {
        status: StatusCode,
        response_err: Option<String>,
    },
    #[error("server returned error ({status:?}): {description}")]
    ServerReturnedError {
        status: StatusCode,
        description: String,
    },
}
