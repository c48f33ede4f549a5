// External imports
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
// Local imports
use crate::bvh::{Bvh, Node};
use crate::error::{Error, Result};

// The on-disk format of a cached BVH: a small header followed by the raw
// node array, everything little-endian.

/// `'bvhc'`, read back as a little-endian u32
const BVH_MAGIC : u32 = 0x6368_7662;
const BVH_FILE_VERSION : u32 = 0;

impl Bvh {
  pub fn save_to_file( &self, path : &Path ) -> Result< () > {
    let file = File::create( path ).map_err( |e| {
      error!( "Failed to open output BVH file '{}' for writing: {}", path.display( ), e );
      e
    } )?;
    let mut w = BufWriter::new( file );

    w.write_u32::< LittleEndian >( BVH_MAGIC )?;
    w.write_u32::< LittleEndian >( BVH_FILE_VERSION )?;
    w.write_u32::< LittleEndian >( self.num_nodes( ) )?;

    for node in &self.nodes {
      write_node( &mut w, node )?;
    }

    w.flush( )?;
    Ok( () )
  }

  /// Reads a previously saved hierarchy.
  ///
  /// An unknown magic or version yields `Error::InvalidInput`, so callers
  /// can tell a stale cache (fall back to a rebuild) from an I/O failure
  pub fn load_from_file( path : &Path ) -> Result< Bvh > {
    let file = File::open( path ).map_err( |e| {
      error!( "Failed to open BVH file '{}' for reading: {}", path.display( ), e );
      e
    } )?;
    let mut r = BufReader::new( file );

    let magic = r.read_u32::< LittleEndian >( )?;
    if magic != BVH_MAGIC {
      return Err( Error::InvalidInput( format!(
        "corrupted BVH file (invalid magic value {:#010x})", magic ) ) );
    }

    let version = r.read_u32::< LittleEndian >( )?;
    if version != BVH_FILE_VERSION {
      return Err( Error::InvalidInput( format!(
        "unsupported BVH file version {} (expected {})", version, BVH_FILE_VERSION ) ) );
    }

    let num_nodes = r.read_u32::< LittleEndian >( )?;
    let mut nodes = Vec::with_capacity( num_nodes as usize );
    for _i in 0..num_nodes {
      nodes.push( read_node( &mut r )? );
    }

    info!( "Loaded BVH '{}' (num nodes = {})", path.display( ), num_nodes );
    Ok( Bvh { nodes } )
  }
}

fn write_node< W : Write >( w : &mut W, node : &Node ) -> Result< () > {
  for i in 0..3 {
    w.write_f32::< LittleEndian >( node.min[ i ] )?;
  }
  w.write_u32::< LittleEndian >( node.child_index )?;
  for i in 0..3 {
    w.write_f32::< LittleEndian >( node.max[ i ] )?;
  }
  w.write_u16::< LittleEndian >( node.num_leaves )?;
  w.write_u8( node.split_axis )?;
  w.write_u8( node.pad )?;
  Ok( () )
}

fn read_node< R : Read >( r : &mut R ) -> Result< Node > {
  let mut node = Node::new( );
  for i in 0..3 {
    node.min[ i ] = r.read_f32::< LittleEndian >( )?;
  }
  node.child_index = r.read_u32::< LittleEndian >( )?;
  for i in 0..3 {
    node.max[ i ] = r.read_f32::< LittleEndian >( )?;
  }
  node.num_leaves = r.read_u16::< LittleEndian >( )?;
  node.split_axis = r.read_u8( )?;
  node.pad = r.read_u8( )?;
  Ok( node )
}

#[cfg(test)]
mod tests {
  use crate::bvh::{build, BuildParams, Bvh};
  use crate::geometry::Aabb;
  use crate::math::Vec3;
  use crate::rng::Rng;
  use std::fs;
  use std::io::Write;

  fn sample_bvh( n : usize ) -> Bvh {
    let mut rng = Rng::new( 42 );
    let boxes : Vec< Aabb > = ( 0..n ).map( |_| {
      let c = Vec3::new( rng.next( ), rng.next( ), rng.next( ) );
      Aabb::new( c, c + Vec3::splat( 0.01 ) )
    } ).collect( );
    build( &boxes, &BuildParams::default( ) ).0
  }

  #[test]
  fn save_load_roundtrip_is_identical( ) {
    let bvh = sample_bvh( 10_000 );
    let dir = tempfile::tempdir( ).unwrap( );
    let path = dir.path( ).join( "mesh.bvhc" );

    bvh.save_to_file( &path ).unwrap( );
    let loaded = Bvh::load_from_file( &path ).unwrap( );

    assert_eq!( bvh.nodes, loaded.nodes );
  }

  #[test]
  fn save_twice_produces_identical_bytes( ) {
    let bvh = sample_bvh( 1_000 );
    let dir = tempfile::tempdir( ).unwrap( );
    let path_a = dir.path( ).join( "a.bvhc" );
    let path_b = dir.path( ).join( "b.bvhc" );

    bvh.save_to_file( &path_a ).unwrap( );
    bvh.save_to_file( &path_b ).unwrap( );

    assert_eq!( fs::read( &path_a ).unwrap( ), fs::read( &path_b ).unwrap( ) );
  }

  #[test]
  fn bad_magic_is_rejected( ) {
    let dir = tempfile::tempdir( ).unwrap( );
    let path = dir.path( ).join( "bad.bvhc" );
    let mut f = fs::File::create( &path ).unwrap( );
    f.write_all( &[ 0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0, 0, 0, 0, 0 ] ).unwrap( );
    drop( f );

    match Bvh::load_from_file( &path ) {
      Err( crate::error::Error::InvalidInput( _ ) ) => {},
      other => panic!( "expected InvalidInput, got {:?}", other.map( |b| b.num_nodes( ) ) )
    }
  }

  #[test]
  fn bad_version_is_rejected( ) {
    let bvh = sample_bvh( 10 );
    let dir = tempfile::tempdir( ).unwrap( );
    let path = dir.path( ).join( "v9.bvhc" );
    bvh.save_to_file( &path ).unwrap( );

    // Bump the version field in place
    let mut bytes = fs::read( &path ).unwrap( );
    bytes[ 4 ] = 9;
    fs::write( &path, &bytes ).unwrap( );

    assert!( matches!(
      Bvh::load_from_file( &path )
    , Err( crate::error::Error::InvalidInput( _ ) )
    ) );
  }

  #[test]
  fn truncated_file_is_an_io_error( ) {
    let bvh = sample_bvh( 100 );
    let dir = tempfile::tempdir( ).unwrap( );
    let path = dir.path( ).join( "short.bvhc" );
    bvh.save_to_file( &path ).unwrap( );

    let bytes = fs::read( &path ).unwrap( );
    fs::write( &path, &bytes[ ..bytes.len( ) / 2 ] ).unwrap( );

    assert!( matches!(
      Bvh::load_from_file( &path )
    , Err( crate::error::Error::Io( _ ) )
    ) );
  }
}
