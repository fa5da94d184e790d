mod callbacks;
mod cart;
mod helpers;
mod mocks;
mod orders;

mod misc {
    use actix_web::{http::StatusCode, test::TestRequest};

    use super::helpers::send_request;
    use crate::routes::health;

    #[actix_web::test]
    async fn health_check_needs_no_token() {
        let (status, body) = send_request(TestRequest::get().uri("/health"), |cfg| {
            cfg.service(health);
        })
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "👍️\n");
    }
}
