/// unwrap a store result or answer the request with a 500
macro_rules! db_handle_get_error_http {
    ( $data:expr, $target:expr, $type_str:expr) => {
        match $data {
            Ok(e) => e,
            Err(error) => {
                error!(target:$target, "Error getting {}. (error: {})", $type_str, error);
                return Err(Status::InternalServerError);
            }
        }
    }
}

/// open a connection to the document store or answer with a 500
macro_rules! db_connection_http {
    ( $state:expr, $target:expr ) => {
        match establish_connection(&$state.database_url) {
            Ok(conn) => conn,
            Err(error) => {
                error!(target:$target, "Error connecting to the document store. (error: {})", error);
                return Err(Status::InternalServerError);
            }
        }
    }
}

pub(crate) use db_connection_http;
pub(crate) use db_handle_get_error_http;
