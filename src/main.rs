#[actix_web::main]
async fn main() -> std::io::Result<()> {
    docx_template_server::run().await
}
