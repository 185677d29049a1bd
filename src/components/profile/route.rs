use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

use crate::components::profile::editor::Draft;
use crate::components::profile::view;
use crate::components::{find_surface, layout};
use crate::context::Context;
use crate::lib::util::redirect_to;
use crate::surface::{ShellView, Surface};

type Response = actix_web::Result<HttpResponse>;

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
  #[serde(default)]
  pub full_name: String,
  #[serde(default)]
  pub avatar_url: String,
  #[serde(default)]
  pub phone: String,
}

impl From<ProfileForm> for Draft {
  fn from(form: ProfileForm) -> Self {
    Draft {
      full_name: form.full_name.trim().to_owned(),
      avatar_url: form.avatar_url.trim().to_owned(),
      phone: form.phone.trim().to_owned(),
    }
  }
}

pub fn create_router(cfg: &mut web::ServiceConfig) {
  cfg.service(web::resource("/profile").route(web::get().to(show_profile)));
  cfg.service(web::resource("/profile/edit").route(web::post().to(edit_profile)));
  cfg.service(web::resource("/profile/cancel").route(web::post().to(cancel_edit)));
  cfg.service(web::resource("/profile/save").route(web::post().to(save_profile)));
  cfg.service(web::resource("/profile/retry").route(web::post().to(retry_load)));
}

fn signed_in_surface(ctx: &Context, req: &HttpRequest) -> Option<Arc<Surface>> {
  find_surface(ctx, req).filter(|surface| surface.is_signed_in())
}

async fn show_profile(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  let surface = match signed_in_surface(&ctx, &req) {
    Some(surface) => surface,
    None => return redirect_to("/sign-in"),
  };

  surface.load_profile().await;

  match surface.view() {
    // Signed out while the bootstrap ran.
    ShellView::SignedOut => redirect_to("/sign-in"),
    ShellView::SignedIn { email, state, busy } => {
      let page = view::profile_page(&email, &state, busy);
      Ok(layout::render(StatusCode::OK, page))
    }
  }
}

async fn edit_profile(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  if let Some(surface) = signed_in_surface(&ctx, &req) {
    surface.edit();
  }
  redirect_to("/profile")
}

async fn cancel_edit(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  if let Some(surface) = signed_in_surface(&ctx, &req) {
    surface.cancel();
  }
  redirect_to("/profile")
}

async fn retry_load(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  if let Some(surface) = signed_in_surface(&ctx, &req) {
    surface.retry();
  }
  redirect_to("/profile")
}

async fn save_profile(
  ctx: web::Data<Context>,
  req: HttpRequest,
  form: web::Form<ProfileForm>,
) -> Response {
  if let Some(surface) = signed_in_surface(&ctx, &req) {
    surface.save(form.into_inner().into()).await;
  }
  redirect_to("/profile")
}
