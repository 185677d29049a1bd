use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::components::session::view;
use crate::components::{find_surface, layout, surface_cookie};
use crate::context::Context;
use crate::errors::{ErrorKind, Notice};
use crate::lib::util::redirect_to;

type Response = actix_web::Result<HttpResponse>;

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

pub fn create_router(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::resource("/sign-in")
      .route(web::get().to(show_sign_in))
      .route(web::post().to(sign_in)),
  );
}

async fn show_sign_in(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  if let Some(surface) = find_surface(&ctx, &req) {
    if surface.is_signed_in() {
      return redirect_to("/profile");
    }
  }

  let page = view::sign_in_page("", None);
  Ok(layout::render(StatusCode::OK, page))
}

// Failures are shown on the form. A browser without a surface only gets
// one registered once the sign-in succeeds.
async fn sign_in(
  ctx: web::Data<Context>,
  req: HttpRequest,
  body: web::Form<Credentials>,
) -> Response {
  let (surface, is_new) = match find_surface(&ctx, &req) {
    Some(surface) => (surface, false),
    None => (ctx.surfaces.create(), true),
  };
  let credentials = body.into_inner();

  match surface.sign_in(credentials.email.trim(), &credentials.password).await {
    Ok(()) => {
      let cookie = surface_cookie(&ctx, &surface);
      if is_new {
        ctx.surfaces.register(surface);
      }

      Ok(
        HttpResponse::Found()
          .cookie(cookie)
          .header(header::LOCATION, "/profile")
          .finish(),
      )
    }
    Err(err) => {
      debug!("Sign in failed for {}: {}", credentials.email, err);
      let mut notice = Notice::from(&err);
      let status = match err.kind() {
        ErrorKind::Unauthenticated => {
          notice.message = "Invalid email or password".to_owned();
          StatusCode::UNAUTHORIZED
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::SERVICE_UNAVAILABLE,
      };
      let page = view::sign_in_page(&credentials.email, Some(&notice));

      Ok(layout::render(status, page))
    }
  }
}
