use crate::config::SchemeConfig;

use super::types::{Unauthenticated, UnauthenticatedReason, UnauthenticatedResponse};

/// Builds the unauthenticated outcome for a request to `path_and_query`.
pub(crate) fn unauthenticated(
    config: &SchemeConfig,
    reason: UnauthenticatedReason,
    path_and_query: &str,
) -> Unauthenticated {
    let response = match config.redirect_to() {
        None => UnauthenticatedResponse::Unauthorized,
        Some(redirect_to) => UnauthenticatedResponse::Redirect(build_redirect(
            redirect_to,
            config.append_next(),
            path_and_query,
        )),
    };

    tracing::debug!("Unauthenticated: {}, response: {:?}", reason, response);

    Unauthenticated {
        reason,
        response,
        item: None,
        diagnostic: None,
    }
}

pub(crate) fn build_redirect(
    redirect_to: &str,
    append_next: Option<&str>,
    path_and_query: &str,
) -> String {
    let Some(param) = append_next else {
        return redirect_to.to_string();
    };

    let separator = if redirect_to.contains('?') { '&' } else { '?' };
    format!(
        "{redirect_to}{separator}{}={}",
        urlencoding::encode(param),
        urlencoding::encode(path_and_query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemeOptions;
    use proptest::prelude::*;

    #[test]
    fn test_unauthorized_without_redirect() {
        let config = SchemeConfig::try_from(SchemeOptions::new("testing")).unwrap();

        let outcome = unauthenticated(&config, UnauthenticatedReason::MissingCookie, "/secret");
        assert_eq!(outcome.response, UnauthenticatedResponse::Unauthorized);
        assert_eq!(outcome.reason, UnauthenticatedReason::MissingCookie);
    }

    #[test]
    fn test_redirect_without_next() {
        let config =
            SchemeConfig::try_from(SchemeOptions::new("testing").redirect_to("/login")).unwrap();

        let outcome = unauthenticated(&config, UnauthenticatedReason::SessionNotFound, "/secret");
        assert_eq!(
            outcome.response,
            UnauthenticatedResponse::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_redirect_appends_next() {
        assert_eq!(
            build_redirect("/login", Some("next"), "/secret?x=1"),
            "/login?next=%2Fsecret%3Fx%3D1"
        );
    }

    #[test]
    fn test_redirect_appends_to_existing_query() {
        assert_eq!(
            build_redirect("/login?a=b", Some("next"), "/secret?x=1"),
            "/login?a=b&next=%2Fsecret%3Fx%3D1"
        );
    }

    #[test]
    fn test_redirect_custom_param_on_absolute_url() {
        assert_eq!(
            build_redirect("https://auth.example.com/login", Some("return_to"), "/"),
            "https://auth.example.com/login?return_to=%2F"
        );
    }

    proptest! {
        #[test]
        fn next_param_decodes_to_requested_path(path in "/[ -~]{0,64}") {
            let uri = build_redirect("/login", Some("next"), &path);
            let encoded = uri.strip_prefix("/login?next=").unwrap();

            prop_assert!(!encoded.contains('&'));
            prop_assert!(!encoded.contains('?'));
            prop_assert_eq!(urlencoding::decode(encoded).unwrap(), path);
        }
    }
}
