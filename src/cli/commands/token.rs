use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::gateway::{Principal, Role};

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Principal id (the user record id)")]
    pub user_id: String,

    #[arg(long, help = "Role: ADMIN, DISPATCHER or DRIVER")]
    pub role: Role,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let mut principal = Principal::new(args.user_id, args.role);
    principal.name = args.name;
    principal.email = args.email;

    let claims = match args.hours {
        Some(hours) => Claims::with_expiry(&principal, hours),
        None => Claims::new(&principal),
    };
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({ "token": token, "sub": claims.sub, "role": claims.role, "exp": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
