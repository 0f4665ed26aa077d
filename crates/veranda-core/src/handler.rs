//! Handler functions and their return-value handling.
//!
//! Handlers are plain async functions. Any function whose parameters all
//! implement [`FromContext`](crate::extractor::FromContext) and whose
//! return type implements [`HandleResponse`] is a handler:
//!
//! ```rust,ignore
//! // Side effects only.
//! async fn log_message(event: EventCtx<SendMessageEvent>) {
//!     info!("{}: {}", event.nickname, event.message.plain_text());
//! }
//!
//! // Returning a String replies into the event's room.
//! async fn greet(_event: EventCtx<SendMessageEvent>) -> String {
//!     "world".to_string()
//! }
//!
//! // Errors are caught and attributed to this handler.
//! async fn risky(bot: BotApi<VillaBot>) -> Result<(), ApiError> {
//!     bot.get_villa(100).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::HandlerError;
use crate::extractor::FromContext;
use crate::message::Message;

// ============================================================================
// HandleResponse
// ============================================================================

/// Turns a handler's return value into an outcome.
#[async_trait]
pub trait HandleResponse: Send {
    /// Consumes the value, performing any follow-up action.
    async fn into_response(self, ctx: Arc<Context>) -> Result<(), HandlerError>;
}

/// `()` -- nothing to do.
#[async_trait]
impl HandleResponse for () {
    async fn into_response(self, _ctx: Arc<Context>) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// `String` -- reply into the event's room.
#[async_trait]
impl HandleResponse for String {
    async fn into_response(self, ctx: Arc<Context>) -> Result<(), HandlerError> {
        Message::from(self).into_response(ctx).await
    }
}

/// `Message` -- reply into the event's room.
#[async_trait]
impl HandleResponse for Message {
    async fn into_response(self, ctx: Arc<Context>) -> Result<(), HandlerError> {
        ctx.bot()
            .send(ctx.event(), self)
            .await
            .map(|_| ())
            .map_err(HandlerError::failed)
    }
}

/// `Option<T>` -- act on `Some`, do nothing on `None`.
#[async_trait]
impl<T: HandleResponse> HandleResponse for Option<T> {
    async fn into_response(self, ctx: Arc<Context>) -> Result<(), HandlerError> {
        match self {
            Some(value) => value.into_response(ctx).await,
            None => Ok(()),
        }
    }
}

/// `Result<T, E>` -- act on `Ok`, surface `Err` as this handler's failure.
#[async_trait]
impl<T, E> HandleResponse for Result<T, E>
where
    T: HandleResponse,
    E: std::fmt::Display + Send,
{
    async fn into_response(self, ctx: Arc<Context>) -> Result<(), HandlerError> {
        match self {
            Ok(value) => value.into_response(ctx).await,
            Err(e) => Err(HandlerError::failed(e)),
        }
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// An event handler.
///
/// Implemented via blanket impls for async functions of 0 to 8 parameters;
/// the type parameter `T` is the tuple of extractor types and exists only
/// to keep the impls coherent.
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Runs the handler against the context.
    async fn call(self, ctx: Arc<Context>) -> Result<(), HandlerError>;
}

/// A type-erased handler stored in matchers.
///
/// A closure that clones the original handler on every invocation, so one
/// registration can serve many concurrent events.
pub type BoxedHandler =
    Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Erases a handler function into a [`BoxedHandler`].
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T> + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandleResponse + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<Context>) -> Result<(), HandlerError> {
                $(
                    // An extractor miss skips the handler without failing it.
                    let Ok($ty) = $ty::from_context(&ctx) else {
                        return Ok(());
                    };
                )*
                let res = (self)($($ty,)*).await;
                res.into_response(ctx).await
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
