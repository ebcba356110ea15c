use helpdesk_lib::{
    core::types::{
        DocumentSection, ExtractedImage, ExtractedNetworkData, NetworkDeviceCandidate, ServerCandidate,
    },
    db::{
        repositories::{diagrams, inventory},
        Database,
    },
    extractor::images,
    importer::{import_network_data, DiagramFolder, ImportOptions, IMPORT_SOURCE},
    storage::{Bucket, BucketStore},
};
use image::{DynamicImage, Rgb, RgbImage};

fn png_image(name: &str) -> (ExtractedImage, Vec<u8>) {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([200, 10, 10])));
    let png = images::encode_png(&img).expect("encode png");
    (images::extracted_image(name.to_string(), &png, "word/media/image1.png"), png)
}

fn section(number: usize, title: &str, text: &str, images: Vec<ExtractedImage>) -> DocumentSection {
    DocumentSection {
        id: format!("section-{number}"),
        section_number: number,
        title: title.to_string(),
        text: text.to_string(),
        images,
    }
}

#[tokio::test]
async fn import_writes_diagrams_and_inventory() {
    let db = Database::in_memory().await.expect("db should initialize");
    let dir = tempfile::tempdir().expect("temp dir");
    let store = BucketStore::new(dir.path()).expect("bucket store");

    let (image, png) = png_image("Image 1");
    let data = ExtractedNetworkData {
        servers: vec![ServerCandidate {
            name: "DC01 domain controller".to_string(),
            server_type: "Active Directory".to_string(),
            ip: Some("10.0.0.10".to_string()),
            specs: Some("4 vCPU 16GB RAM".to_string()),
        }],
        network_devices: vec![NetworkDeviceCandidate {
            name: "Core switch".to_string(),
            device_type: "Switch".to_string(),
            ip: None,
        }],
        sections: vec![
            section(1, "Overview", "Head office summary", vec![]),
            section(2, "Topology", "", vec![image]),
        ],
        ..ExtractedNetworkData::default()
    };

    let options = ImportOptions {
        folder: DiagramFolder::CloudNetworks,
        ..ImportOptions::everything(Some("network.docx".to_string()))
    };
    let report = import_network_data(&db, &store, &data, &options)
        .await
        .expect("import should run");

    assert_eq!(report.diagrams_created, 1);
    assert_eq!(report.servers_created, 1);
    assert_eq!(report.network_devices_created, 1);
    assert!(report.failures.is_empty());

    let rows = diagrams::list_diagrams(db.pool(), Some("cloud-networks"))
        .await
        .expect("list diagrams");
    assert_eq!(rows.len(), 1);
    let diagram = &rows[0];
    assert_eq!(diagram.title, "Topology");
    assert_eq!(diagram.description, "Topology", "empty text falls back to title");
    assert_eq!(diagram.section_number, Some(2));
    assert_eq!(diagram.source_file.as_deref(), Some("network.docx"));
    assert_eq!(diagram.bucket, "diagrams");
    assert!(diagram.object_path.starts_with("cloud-networks/"));
    assert!(diagram.object_path.contains("-section-2-"));
    assert!(diagram.object_path.ends_with(".png"));

    let stored = store
        .download(Bucket::Diagrams, &diagram.object_path)
        .expect("object should exist");
    assert_eq!(stored, png);

    let servers = inventory::list_servers(db.pool()).await.expect("list servers");
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].source, IMPORT_SOURCE);
    assert_eq!(servers[0].ip_address.as_deref(), Some("10.0.0.10"));
}

#[tokio::test]
async fn bad_image_is_reported_without_undoing_the_rest() {
    let db = Database::in_memory().await.expect("db should initialize");
    let dir = tempfile::tempdir().expect("temp dir");
    let store = BucketStore::new(dir.path()).expect("bucket store");

    let (good, _) = png_image("Image 1");
    let broken = ExtractedImage {
        name: "Image 2".to_string(),
        data_url: "not-a-data-url".to_string(),
        width: 0,
        height: 0,
    };
    let data = ExtractedNetworkData {
        sections: vec![
            section(1, "Site A", "Site A rack", vec![good]),
            section(2, "Site B", "Site B rack", vec![broken]),
        ],
        ..ExtractedNetworkData::default()
    };

    let report = import_network_data(&db, &store, &data, &ImportOptions::everything(None))
        .await
        .expect("import should run");
    assert_eq!(report.diagrams_created, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].item.contains("Image 2"));

    let rows = diagrams::list_diagrams(db.pool(), None).await.expect("list diagrams");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].folder, "company-network");
    assert_eq!(rows[0].description, "Site A rack");
}

#[tokio::test]
async fn inventory_can_be_left_out() {
    let db = Database::in_memory().await.expect("db should initialize");
    let dir = tempfile::tempdir().expect("temp dir");
    let store = BucketStore::new(dir.path()).expect("bucket store");

    let data = ExtractedNetworkData {
        servers: vec![ServerCandidate {
            name: "FS01 file share".to_string(),
            server_type: "File Server".to_string(),
            ip: None,
            specs: None,
        }],
        ..ExtractedNetworkData::default()
    };

    let report = import_network_data(&db, &store, &data, &ImportOptions::default())
        .await
        .expect("import should run");
    assert_eq!(report.servers_created, 0);
    assert!(inventory::list_servers(db.pool()).await.expect("list").is_empty());
}
