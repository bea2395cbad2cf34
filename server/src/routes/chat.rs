use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use escrow_chat_core::api::{
    AcceptOfferRequest, AddMessageRequest, MakeOfferRequest, MakeOfferResponse,
    RaiseDisputeRequest,
};
use escrow_chat_core::{Chat, Dispute};

use super::{verbose_error, ChatIdParam};
use crate::db::{Db, DbError};

#[rocket::post("/api/chat/make-offer", data = "<request>")]
pub async fn make_offer(
    db: &State<Db>,
    request: Json<MakeOfferRequest>,
) -> (Status, Json<Result<MakeOfferResponse, String>>) {
    match db.create(request.into_inner().pubkey).await {
        Ok(token) => (Status::Ok, Json(Ok(MakeOfferResponse { token }))),
        Err(err) => failure(&err),
    }
}

#[rocket::post("/api/chat/accept-offer/<chat_id>", data = "<request>")]
pub async fn accept_offer(
    db: &State<Db>,
    chat_id: ChatIdParam,
    request: Json<AcceptOfferRequest>,
) -> (Status, Json<Result<(), String>>) {
    match db.accept(chat_id.0, request.into_inner().pubkey).await {
        Ok(()) => (Status::Ok, Json(Ok(()))),
        Err(err) => failure(&err),
    }
}

#[rocket::post("/api/chat/add-message/<chat_id>", data = "<request>")]
pub async fn add_message(
    db: &State<Db>,
    chat_id: ChatIdParam,
    request: Json<AddMessageRequest>,
) -> (Status, Json<Result<(), String>>) {
    match db.add_message(chat_id.0, request.into_inner().message).await {
        Ok(()) => (Status::Ok, Json(Ok(()))),
        Err(err) => failure(&err),
    }
}

#[rocket::post("/api/chat/raise-dispute/<chat_id>", data = "<request>")]
pub async fn raise_dispute(
    db: &State<Db>,
    chat_id: ChatIdParam,
    request: Json<RaiseDisputeRequest>,
) -> (Status, Json<Result<(), String>>) {
    let request = request.into_inner();
    let dispute = Dispute {
        revealed_key: request.private_key,
        raised_by: request.by_user,
    };
    match db.raise_dispute(chat_id.0, dispute).await {
        Ok(()) => (Status::Ok, Json(Ok(()))),
        Err(err) => failure(&err),
    }
}

#[rocket::get("/api/chat/<chat_id>")]
pub async fn fetch_chat(
    db: &State<Db>,
    chat_id: ChatIdParam,
) -> (Status, Json<Result<Chat, String>>) {
    match db.fetch(chat_id.0).await {
        Ok(chat) => (Status::Ok, Json(Ok(chat))),
        Err(err) => failure(&err),
    }
}

fn failure<T>(err: &DbError) -> (Status, Json<Result<T, String>>) {
    let status = match err {
        DbError::ChatNotFound => Status::NotFound,
        DbError::AlreadyAccepted(_) | DbError::Disputed(_) => Status::Conflict,
        DbError::Storage(_) => Status::InternalServerError,
    };
    if status == Status::InternalServerError {
        tracing::error!(error = %verbose_error(err), "request failed on the server side");
    }
    (status, Json(Err(verbose_error(err))))
}
