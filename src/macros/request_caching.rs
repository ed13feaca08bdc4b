/// check if a request is in the cache, if it is, return it.
/// else follow the normal flow
macro_rules! read_cache_request {
    ( $cache:expr, $origin:expr ) => {
        if let Some(cached) = $cache.get_data(&$origin.to_string()) {
            return Ok(rocket::serde::json::Json(cached));
        }
    };
}

/// add the response to the request to the cache and then return it.
macro_rules! cache_response {
    ( $cache:expr, $origin:expr, $data:expr ) => {{
        let data = $data;
        $cache.set_data(&$origin.to_string(), &data);
        return Ok(rocket::serde::json::Json(data));
    }};
}

pub(crate) use cache_response;
pub(crate) use read_cache_request;
