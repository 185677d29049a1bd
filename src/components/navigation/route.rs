use actix_web::{web, HttpRequest, HttpResponse};

use crate::components::find_surface;
use crate::context::Context;
use crate::lib::util::redirect_to;

type Response = actix_web::Result<HttpResponse>;

pub fn create_router(cfg: &mut web::ServiceConfig) {
  cfg.service(web::resource("/sign-out").route(web::post().to(sign_out)));
}

// The surface returns to the signed-out state through the session
// notification that signing out emits.
async fn sign_out(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  if let Some(surface) = find_surface(&ctx, &req) {
    surface.sign_out().await;
  }

  redirect_to("/sign-in")
}
