use api_types::{
    error::ErrorBody,
    friends::{Direction, Profile, ProfilesResponse, RequestNew},
};
use engine::ErrorKind;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};

use crate::{ClientError, FriendsBackend};

const USER_ID_HEADER: &str = "x-user-id";

/// Backend calling the HTTP server.
///
/// The acting user of every call is sent in the `x-user-id` header, as the
/// authenticating gateway would.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::Server(format!("invalid base_url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Server(format!(
                "invalid base_url: {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// `segments` are escaped individually, so user ids are safe in paths.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Server("invalid base_url".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        user_id: &str,
        segments: &[&str],
    ) -> Result<RequestBuilder, ClientError> {
        Ok(self
            .http
            .request(method, self.endpoint(segments)?)
            .header(USER_ID_HEADER, user_id))
    }

    async fn profiles(&self, request: RequestBuilder) -> Result<Vec<Profile>, ClientError> {
        let res = check(request.send().await?).await?;
        Ok(res.json::<ProfilesResponse>().await?.profiles)
    }

    async fn command(&self, request: RequestBuilder) -> Result<(), ClientError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into the matching `ClientError`.
async fn check(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }

    let err = match res.json::<ErrorBody>().await {
        Ok(body) => match ErrorKind::try_from(body.code.as_str()) {
            Ok(kind) => ClientError::Api {
                kind,
                message: body.error,
            },
            Err(_) => ClientError::Server(body.error),
        },
        Err(_) => ClientError::Server(format!("unexpected status {status}")),
    };
    tracing::debug!(%status, "server rejected call: {err}");
    Err(err)
}

impl FriendsBackend for HttpBackend {
    async fn search_users(
        &self,
        term: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<Profile>, ClientError> {
        let request = self
            .request(Method::GET, exclude_user_id, &["users", "search"])?
            .query(&[("q", term)]);
        self.profiles(request).await
    }

    async fn send_request(&self, from_user_id: &str, to_user_id: &str) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, from_user_id, &["requests"])?
            .json(&RequestNew {
                to_user_id: to_user_id.to_string(),
            });
        self.command(request).await
    }

    async fn accept_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::POST, user_id, &["requests", friend_id, "accept"])?;
        self.command(request).await
    }

    async fn reject_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::POST, user_id, &["requests", friend_id, "reject"])?;
        self.command(request).await
    }

    async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, user_id, &["friends", friend_id])?;
        self.command(request).await
    }

    async fn friends(&self, user_id: &str) -> Result<Vec<Profile>, ClientError> {
        let request = self.request(Method::GET, user_id, &["friends"])?;
        self.profiles(request).await
    }

    async fn requests(
        &self,
        user_id: &str,
        direction: Direction,
    ) -> Result<Vec<Profile>, ClientError> {
        let request = self.request(Method::GET, user_id, &["requests", direction.as_str()])?;
        self.profiles(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_segments() {
        let backend = HttpBackend::new("http://localhost:3000/api/").unwrap();
        let url = backend.endpoint(&["friends", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/friends/a%2Fb%20c");
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }
}
