use crate::{
    api,
    cli::{actions::Action, globals::GlobalArgs},
    supabase::{ContentClient, IdentityClient, ServiceClient},
};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            environment,
            frontend_base_url,
            upload_dir,
        } => {
            let identity = IdentityClient::new(globals)?;
            let service = ServiceClient::new(globals)?;
            let content = ContentClient::new(globals)?;

            let config = api::ServerConfig {
                environment,
                frontend_base_url,
                upload_dir,
            };

            api::new(port, identity, service, content, config).await?;
        }
    }

    Ok(())
}
