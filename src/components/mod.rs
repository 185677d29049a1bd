pub mod index;
pub mod layout;
pub mod navigation;
pub mod profile;
pub mod session;

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::context::Context;
use crate::errors::Error;
use crate::surface::Surface;

pub fn create_router(cfg: &mut web::ServiceConfig) {
  index::route::create_router(cfg);
  session::route::create_router(cfg);
  navigation::route::create_router(cfg);
  profile::route::create_router(cfg);
}

pub async fn not_found(req: HttpRequest) -> actix_web::Result<HttpResponse> {
  Err(Error::PageNotFound(req.path().to_owned()).into())
}

/// The surface the request's cookie points at, if it is still open.
pub fn find_surface(ctx: &Context, req: &HttpRequest) -> Option<Arc<Surface>> {
  let cookie = req.cookie(&ctx.settings.session.cookie_name)?;
  ctx.surfaces.find(cookie.value())
}

pub fn surface_cookie(ctx: &Context, surface: &Surface) -> Cookie<'static> {
  Cookie::build(ctx.settings.session.cookie_name.clone(), surface.id.clone())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish()
}
