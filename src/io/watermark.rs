/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use hifitime::Epoch;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use std::collections::HashMap;

/// Name and version of the crate, stored in the metadata of every file written.
pub(crate) fn prj_name_ver() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Properties shared by every Parquet writer: ZSTD compression and provenance metadata, plus `metadata`.
pub(crate) fn pq_writer(metadata: Option<HashMap<String, String>>) -> Option<WriterProperties> {
    let bldr = WriterProperties::builder().set_compression(Compression::ZSTD(ZstdLevel::default()));

    let mut file_metadata = vec![
        KeyValue::new("Generated by".to_string(), prj_name_ver()),
        KeyValue::new("Created by".to_string(), whoami::realname()),
    ];
    if let Ok(now) = Epoch::now() {
        file_metadata.push(KeyValue::new("Created on".to_string(), format!("{now}")));
    }

    if let Some(custom_md) = metadata {
        let mut keys: Vec<_> = custom_md.into_iter().collect();
        keys.sort();
        for (k, v) in keys {
            file_metadata.push(KeyValue::new(k, v));
        }
    }

    Some(bldr.set_key_value_metadata(Some(file_metadata)).build())
}
