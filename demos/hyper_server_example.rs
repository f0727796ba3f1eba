use std::{convert::Infallible, net::SocketAddr};

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyStream, Full};
use hyper::{
    body::Incoming,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Request, Response, StatusCode,
};
// Import the multispool types.
use multispool::{Constraints, DataSize, Multipart, Part, SizeLimit};

// A handler for incoming requests.
async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    // Extract the `multipart/form-data` boundary from the headers.
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multispool::parse_boundary(ct).ok());

    // Send `BAD_REQUEST` status if the content-type is not multipart/form-data.
    let boundary = match boundary {
        Some(boundary) => boundary,
        None => return Ok(respond(StatusCode::BAD_REQUEST, "BAD REQUEST".to_owned())),
    };

    // The declared length lets oversized uploads be rejected before decoding starts.
    let content_length = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|len| len.to_str().ok())
        .and_then(|len| len.parse::<u64>().ok());

    match process_multipart(req.into_body(), boundary, content_length).await {
        Ok(summary) => Ok(respond(StatusCode::OK, summary)),
        Err(err) => Ok(respond(err.status_code(), format!("{}", err))),
    }
}

fn respond(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(body));
    *response.status_mut() = status;
    response
}

// Process the request body as multipart/form-data.
async fn process_multipart(body: Incoming, boundary: String, content_length: Option<u64>) -> multispool::Result<String> {
    // Convert the body into a stream of data frames.
    let body_stream = BodyStream::new(body)
        .filter_map(|result| async move { result.map(|frame| frame.into_data().ok()).transpose() });

    // Keep uploads under 10 MiB in total and text fields under 64 KiB.
    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(DataSize::mebibytes(10))
            .per_field(DataSize::mebibytes(10))
            .for_field("comment", DataSize::kibibytes(64)),
    );

    // Decode the whole body, binary parts end up in temporary files.
    let parts = Multipart::with_constraints(body_stream, boundary, constraints)
        .content_length(content_length)
        .parts()
        .await?;

    let mut summary = String::new();
    for part in parts {
        match part {
            Part::Text { metadata, value } => {
                summary.push_str(&format!("Text {:?}: {:?}\n", metadata.name(), value));
            }
            Part::Binary { metadata, file } => {
                summary.push_str(&format!(
                    "File {:?} ({:?}, {}): {} bytes at {:?}\n",
                    metadata.name(),
                    metadata.file_name(),
                    metadata.content_type(),
                    file.len(),
                    file.path()
                ));
                // Dropping the spooled file deletes it, call `persist` to keep it.
            }
        }
    }

    Ok(summary)
}

#[tokio::main]
async fn main() {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("Server running at: {}", addr);

    let service = hyper::service::service_fn(handle);

    loop {
        let (socket, _remote_addr) = listener.accept().await.unwrap();
        let socket = hyper_util::rt::TokioIo::new(socket);
        tokio::spawn(async move {
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(socket, service)
                .await
            {
                eprintln!("server error: {}", e);
            }
        });
    }
}
