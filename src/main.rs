use actix_web::{middleware, web, App, HttpServer};
#[macro_use]
extern crate log;

mod auth;
mod components;
mod context;
mod database;
mod errors;
mod lib;
mod logger;
mod models;
mod settings;
mod surface;

use context::Context;
use logger::Logger;
use settings::Settings;

#[actix_web::main]
async fn main() {
  let settings = match Settings::new() {
    Ok(value) => value,
    Err(err) => panic!("Failed to setup configuration. Error: {}", err),
  };

  match Logger::setup(&settings) {
    Ok(value) => value,
    Err(_) => panic!("Failed to setup logger"),
  };

  let context = match Context::new(&settings) {
    Ok(value) => web::Data::new(value),
    Err(err) => panic!("Failed to setup backends. Error: {}", err),
  };

  let port = settings.server.port;
  info!("Starting server at {}", settings.server);

  HttpServer::new(move || {
    App::new()
      .wrap(middleware::Compress::default())
      .wrap(middleware::Logger::default())
      .app_data(context.clone())
      .configure(components::create_router)
      .default_service(web::route().to(components::not_found))
  })
  .bind(("0.0.0.0", port))
  .expect("Failed to bind server to specified port")
  .run()
  .await
  .expect("Failed to start server");
}
