use actix_web::{web, HttpRequest, HttpResponse};

use crate::components::find_surface;
use crate::context::Context;
use crate::lib::util::redirect_to;

type Response = actix_web::Result<HttpResponse>;

pub fn create_router(cfg: &mut web::ServiceConfig) {
  cfg.service(web::resource("/").route(web::get().to(index)));
}

async fn index(ctx: web::Data<Context>, req: HttpRequest) -> Response {
  let signed_in = find_surface(&ctx, &req)
    .map(|surface| surface.is_signed_in())
    .unwrap_or(false);

  if signed_in {
    redirect_to("/profile")
  } else {
    redirect_to("/sign-in")
  }
}
