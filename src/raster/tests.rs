use crate::dataset::Dataset;
use crate::errors::RasterError;
use crate::options::{CreationOptions, DatasetOptions, OpenFlags};
use crate::raster::{Buffer, RasterDataType};
use crate::test_utils::TempFixture;
use crate::{Driver, DriverManager};

/// A 3-band 20x10 UInt8 BSQ fixture with deterministic content.
fn bsq_fixture(fixture: &TempFixture) -> Dataset {
    let driver = DriverManager::get_driver_by_name("BSQ").unwrap();
    let ds = driver.create(fixture.path(), 20, 10, 3).unwrap();
    for band_index in 1..=3 {
        let band = ds.rasterband(band_index).unwrap();
        let data: Vec<u8> = (0..200).map(|i| (i % 251) as u8 + band_index as u8).collect();
        band.write((0, 0), &Buffer::new((20, 10), data)).unwrap();
    }
    ds
}

#[test]
fn test_open() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let dataset = Dataset::open(fixture.path());
    assert!(dataset.is_ok());

    let missing = Dataset::open(fixture.path().with_extension("missing"));
    assert!(matches!(missing, Err(RasterError::OpenFailed { .. })));
}

#[test]
fn test_open_restricted_drivers() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let options = DatasetOptions {
        allowed_drivers: Some(&["SNAP"]),
        ..DatasetOptions::default()
    };
    assert!(Dataset::open_ex(fixture.path(), options).is_err());

    let options = DatasetOptions {
        allowed_drivers: Some(&["BSQ"]),
        ..DatasetOptions::default()
    };
    assert!(Dataset::open_ex(fixture.path(), options).is_ok());
}

#[test]
fn test_get_raster_size_and_count() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let dataset = Dataset::open(fixture.path()).unwrap();
    assert_eq!(dataset.raster_size(), (20, 10));
    assert_eq!(dataset.raster_count(), 3);
    assert_eq!(dataset.driver().short_name(), "BSQ");
}

#[test]
fn test_band_index_bounds() {
    let fixture = TempFixture::empty("tiny.bsq");
    let ds = bsq_fixture(&fixture);
    assert!(ds.rasterband(0).is_err());
    assert!(ds.rasterband(4).is_err());
    assert!(ds.rasterband(3).is_ok());
}

#[test]
fn test_projection_round_trip() {
    let fixture = TempFixture::empty("tiny.bsq");
    {
        let ds = bsq_fixture(&fixture);
        assert_eq!(ds.projection(), None);
        ds.set_projection("EPSG:4326").unwrap();
    }
    let reopened = Dataset::open(fixture.path()).unwrap();
    assert_eq!(reopened.projection().as_deref(), Some("EPSG:4326"));
}

#[test]
fn test_geo_transform_round_trip() {
    let fixture = TempFixture::empty("tiny.bsq");
    {
        let ds = bsq_fixture(&fixture);
        assert!(ds.geo_transform().is_err());
        ds.set_geo_transform(&[1000.0, 10.0, 0.0, 2000.0, 0.0, -10.0])
            .unwrap();
    }
    let reopened = Dataset::open(fixture.path()).unwrap();
    let gt = reopened.geo_transform().unwrap();
    assert_eq!(gt, [1000.0, 10.0, 0.0, 2000.0, 0.0, -10.0]);
}

#[test]
fn test_read_raster() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let dataset = Dataset::open(fixture.path()).unwrap();
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.band_type(), RasterDataType::UInt8);
    let rv = rb.read_as::<u8>((2, 3), (2, 3)).unwrap();
    assert_eq!(rv.size, (2, 3));
    // row-major content written as (i % 251) + band
    assert_eq!(rv.data, vec![63, 64, 83, 84, 103, 104]);

    let mut buf = rv;
    rb.read_into_slice((2, 3), (2, 3), &mut buf.data).unwrap();
    assert_eq!(buf.data, vec![63, 64, 83, 84, 103, 104]);
}

#[test]
fn test_write_raster() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let ds = driver.create("", 5, 5, 1).unwrap();
    let band = ds.rasterband(1).unwrap();

    band.write((1, 1), &Buffer::new((2, 2), vec![9u8, 8, 7, 6]))
        .unwrap();
    let rv = band.read_band_as::<u8>().unwrap();
    assert_eq!(rv.data[6], 9);
    assert_eq!(rv.data[7], 8);
    assert_eq!(rv.data[11], 7);
    assert_eq!(rv.data[12], 6);
    assert_eq!(rv.data[0], 0);
}

#[test]
fn test_typed_access_requires_matching_type() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let ds = driver
        .create_with_band_type::<u16, _>("", 4, 4, 1)
        .unwrap();
    let band = ds.rasterband(1).unwrap();
    assert!(matches!(
        band.read_as::<u8>((0, 0), (4, 4)),
        Err(RasterError::ReadFailed { .. })
    ));
    assert!(band.read_as::<u16>((0, 0), (4, 4)).is_ok());
}

#[test]
fn test_window_out_of_bounds() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let ds = driver.create("", 4, 4, 1).unwrap();
    let band = ds.rasterband(1).unwrap();
    assert!(band.read_as::<u8>((2, 2), (4, 4)).is_err());
    assert!(band.read_as::<u8>((-1, 0), (2, 2)).is_err());
}

#[test]
fn test_write_to_read_only_dataset_fails() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let ds = Dataset::open(fixture.path()).unwrap();
    let band = ds.rasterband(1).unwrap();
    assert!(matches!(
        band.write((0, 0), &Buffer::new((1, 1), vec![0u8])),
        Err(RasterError::WriteFailed { .. })
    ));
    assert!(ds.set_projection("EPSG:4326").is_err());
}

#[test]
fn test_update_mode_allows_writes() {
    let fixture = TempFixture::empty("tiny.bsq");
    drop(bsq_fixture(&fixture));

    let options = DatasetOptions {
        open_flags: OpenFlags::UPDATE,
        ..DatasetOptions::default()
    };
    let ds = Dataset::open_ex(fixture.path(), options).unwrap();
    let band = ds.rasterband(1).unwrap();
    band.write((0, 0), &Buffer::new((1, 1), vec![255u8])).unwrap();
    assert_eq!(band.read_as::<u8>((0, 0), (1, 1)).unwrap().data, vec![255]);
}

#[test]
fn test_create_copy_duplicates_content() {
    let src_fixture = TempFixture::empty("src.bsq");
    let src = bsq_fixture(&src_fixture);
    src.set_projection("EPSG:3857").unwrap();

    let dst_fixture = TempFixture::empty("copy.bsq");
    let driver = Driver::get("BSQ").unwrap();
    let dst = src
        .create_copy(&driver, dst_fixture.path(), &CreationOptions::new())
        .unwrap();

    assert_eq!(dst.raster_size(), src.raster_size());
    assert_eq!(dst.raster_count(), src.raster_count());
    assert_eq!(dst.projection().as_deref(), Some("EPSG:3857"));
    for band_index in 1..=3 {
        let want = src.rasterband(band_index).unwrap().read_band_as::<u8>().unwrap();
        let got = dst.rasterband(band_index).unwrap().read_band_as::<u8>().unwrap();
        assert_eq!(want, got);
    }
}

#[test]
fn test_create_copy_to_memory() {
    let src_fixture = TempFixture::empty("src.bsq");
    let src = bsq_fixture(&src_fixture);
    src.set_geo_transform(&[10.0, 1.0, 0.0, 20.0, 0.0, -1.0]).unwrap();

    let driver = Driver::get("MEM").unwrap();
    let dst = src.create_copy(&driver, "", &CreationOptions::new()).unwrap();

    assert_eq!(dst.driver().short_name(), "MEM");
    assert_eq!(dst.raster_size(), (20, 10));
    assert_eq!(dst.raster_count(), 3);
    assert_eq!(dst.geo_transform().unwrap(), [10.0, 1.0, 0.0, 20.0, 0.0, -1.0]);
    for band_index in 1..=3 {
        let want = src.rasterband(band_index).unwrap().read_band_as::<u8>().unwrap();
        let got = dst.rasterband(band_index).unwrap().read_band_as::<u8>().unwrap();
        assert_eq!(want, got);
    }
}

#[test]
fn test_complex_band_type_rejected() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let got = driver.create_with_options(
        "",
        (4, 4),
        1,
        RasterDataType::CFloat32,
        &CreationOptions::new(),
    );
    assert!(matches!(got, Err(RasterError::BadArgument(_))));
}

#[test]
fn test_bsq_fill_option() {
    let fixture = TempFixture::empty("filled.bsq");
    let driver = Driver::get("BSQ").unwrap();
    let options: CreationOptions = [("FILL", "7")].into_iter().collect();
    let ds = driver
        .create_with_options(fixture.path(), (8, 8), 1, RasterDataType::UInt8, &options)
        .unwrap();
    let rv = ds.rasterband(1).unwrap().read_band_as::<u8>().unwrap();
    assert!(rv.data.iter().all(|&v| v == 7));
}

#[test]
fn test_bsq_fill_option_validation() {
    let fixture = TempFixture::empty("filled.bsq");
    let driver = Driver::get("BSQ").unwrap();
    let options: CreationOptions = [("FILL", "not-a-number")].into_iter().collect();
    let got =
        driver.create_with_options(fixture.path(), (8, 8), 1, RasterDataType::UInt8, &options);
    assert!(matches!(got, Err(RasterError::BadArgument(_))));
}

#[test]
fn test_snap_driver_cannot_create() {
    let fixture = TempFixture::empty("direct.snap");
    let driver = Driver::get("SNAP").unwrap();
    assert!(driver.create(fixture.path(), 4, 4, 1).is_err());
}

#[test]
fn test_snap_create_copy_and_reopen() {
    let src_fixture = TempFixture::empty("src.bsq");
    let src = bsq_fixture(&src_fixture);

    let dst_fixture = TempFixture::empty("snapshot.snap");
    let driver = Driver::get("SNAP").unwrap();
    drop(
        src.create_copy(&driver, dst_fixture.path(), &CreationOptions::new())
            .unwrap(),
    );

    let reopened = Dataset::open(dst_fixture.path()).unwrap();
    assert_eq!(reopened.driver().short_name(), "SNAP");
    assert_eq!(reopened.raster_size(), (20, 10));
    let want = src.rasterband(2).unwrap().read_band_as::<u8>().unwrap();
    let got = reopened.rasterband(2).unwrap().read_band_as::<u8>().unwrap();
    assert_eq!(want, got);
}
