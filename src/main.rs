//src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::{admin_guard, auth_guard};
use crate::models::import::ImportReport;
use crate::services::sync_service::SheetRef;

/// Plotdesk - backend de gestão de lotes, leads e chamados
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sobe o servidor HTTP (padrão)
    Serve,
    /// Sincroniza uma vez a planilha externa e imprime o resumo
    ImportSheet {
        /// ID da planilha ou URL completa (padrão: SHEET_ID)
        #[arg(long)]
        sheet: Option<String>,
        /// Intervalo A1, ex.: "Lotes!A1:Z" (padrão: SHEET_RANGE)
        #[arg(long)]
        range: Option<String>,
    },
    /// Cria um usuário administrador
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value_t = false)]
        super_admin: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let allow_origin = match origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin).with_context(|| format!("CORS_ORIGIN inválido: {}", origin))?,
        ),
        None => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}

pub fn build_router(app_state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(app_state.config.cors_origin.as_deref())?;

    // Rotas públicas (site)
    let public_routes = Router::new()
        .route("/plots", get(handlers::plots::list_public_plots))
        .route("/plots/{plot_id}", get(handlers::plots::get_public_plot))
        .route("/leads", post(handlers::leads::submit_lead))
        .route("/settings", get(handlers::settings::public_settings));

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Área do usuário autenticado
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route(
            "/tickets",
            post(handlers::tickets::create_ticket).get(handlers::tickets::list_my_tickets),
        )
        .route("/tickets/{ticket_id}", get(handlers::tickets::get_my_ticket))
        .route("/tickets/{ticket_id}/replies", post(handlers::tickets::reply_my_ticket))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Painel administrativo: papel admin + permissão por rota
    let admin_routes = Router::new()
        .route(
            "/plots",
            post(handlers::plots::create_plot).get(handlers::plots::list_plots),
        )
        .route(
            "/plots/import",
            post(handlers::plots::import_plots)
                .layer(DefaultBodyLimit::max(handlers::media::MAX_UPLOAD_BYTES)),
        )
        .route("/plots/sync", post(handlers::plots::sync_plots))
        .route(
            "/plots/{plot_id}",
            get(handlers::plots::get_plot)
                .put(handlers::plots::update_plot)
                .delete(handlers::plots::delete_plot),
        )
        .route("/plots/{plot_id}/restore", post(handlers::plots::restore_plot))
        .route("/leads", get(handlers::leads::list_leads))
        .route(
            "/leads/{lead_id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        .route("/leads/{lead_id}/notes", post(handlers::leads::add_note))
        .route("/tickets", get(handlers::tickets::list_tickets))
        .route(
            "/tickets/{ticket_id}",
            get(handlers::tickets::get_ticket).put(handlers::tickets::update_ticket),
        )
        .route("/tickets/{ticket_id}/replies", post(handlers::tickets::reply_ticket))
        .route(
            "/media",
            post(handlers::media::upload_media)
                .get(handlers::media::list_media)
                .layer(DefaultBodyLimit::max(handlers::media::MAX_UPLOAD_BYTES)),
        )
        .route("/media/{media_id}", delete(handlers::media::delete_media))
        .route(
            "/settings",
            get(handlers::settings::list_settings).put(handlers::settings::upsert_setting),
        )
        .route("/settings/{key}", delete(handlers::settings::delete_setting))
        .route("/permissions", get(handlers::rbac::list_permissions))
        .route("/users", get(handlers::rbac::list_users))
        .route("/users/{user_id}/role", put(handlers::rbac::update_user_role))
        .route(
            "/users/{user_id}/permissions",
            post(handlers::rbac::grant_permission).put(handlers::rbac::sync_permissions),
        )
        .route(
            "/users/{user_id}/permissions/{permission}",
            delete(handlers::rbac::revoke_permission),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo no router principal
    Ok(Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/public", public_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

fn print_report(report: &ImportReport) {
    println!("{:<12} {:>8}", "linhas", report.processed);
    println!("{:<12} {:>8}", "criados", report.added);
    println!("{:<12} {:>8}", "atualizados", report.updated);
    println!("{:<12} {:>8}", "ignorados", report.skipped);
    println!("{:<12} {:>8}", "erros", report.failed);
    for error in &report.errors {
        println!("  linha {:>5}: {}", error.row, error.message);
    }
}

async fn serve(app_state: AppState) -> anyhow::Result<()> {
    if let Some(every) = app_state.config.sync_interval() {
        app_state.sync_job.clone().spawn(every);
    } else {
        tracing::info!("Sincronização de planilha desligada (SHEET_ID ausente)");
    }

    let addr = app_state.config.bind_addr.clone();
    let app = build_router(app_state)?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Encerrando o servidor...");
        })
        .await
        .context("Erro no servidor Axum")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::from_env()?;
    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(app_state).await,
        Command::ImportSheet { sheet, range } => {
            let sheet = sheet.as_deref().map(SheetRef::parse).transpose()?;
            let report = app_state.sync_job.run_once(sheet, range.as_deref()).await?;
            print_report(&report);
            Ok(())
        }
        Command::CreateAdmin { name, email, password, super_admin } => {
            let user = app_state
                .auth_service
                .create_admin(&name, &email, &password, super_admin)
                .await?;
            println!("Administrador criado: {} <{}>", user.id, user.email);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::path::PathBuf;
    use tower::ServiceExt;

    // Nenhuma destas rotas chega ao banco: o pool é preguiçoso
    fn app() -> Router {
        let config = Config {
            database_url: "postgres://localhost/plotdesk_test".into(),
            jwt_secret: "segredo".into(),
            bind_addr: "127.0.0.1:0".into(),
            media_root: PathBuf::from("storage/media"),
            sheet: None,
            sheet_range: "A1:Z".into(),
            sheet_api_key: None,
            sync_interval_secs: 0,
            sheet_timeout_secs: 5,
            cors_origin: Some("http://localhost:5173".into()),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::from_pool(pool, config).unwrap()).unwrap()
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let request = Request::get("/api/admin/plots").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);

        let request = Request::post("/api/admin/plots/import")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from("Name\nA-1\n"))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_token_is_unauthorized() {
        let request = Request::get("/api/user/me")
            .header(header::AUTHORIZATION, "Bearer nao-e-um-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_lead_submission_is_unprocessable() {
        let request = Request::post("/api/public/leads")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name": "", "email": "sem-arroba"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let request = Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }
}
